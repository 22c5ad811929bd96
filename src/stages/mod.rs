//! Downstream pipeline stages.
//!
//! Each stage takes the [`PipelineState`](crate::models::PipelineState),
//! checks that the earlier stages produced what it needs, extends the state
//! and hands it back. An unmet precondition is a
//! [`StageError::Precondition`](crate::error::StageError::Precondition) and
//! stops the run.
//!
//! | Stage | Module | Needs | Produces |
//! |-------|--------|-------|----------|
//! | summarize_articles | [`summarize`] | ≥ 1 article | one summary per article |
//! | send_email | [`email`] | summaries | digest email via Postmark |
//! | generate_voiceover_script | [`script`] | ≥ 3 summaries | narration script file |
//! | generate_voiceover_audio | [`voiceover`] | script | MP3 via ElevenLabs |
//! | generate_video_headlines | [`headlines`] | script, ≥ 3 summaries | on-screen headlines |
//! | generate_descriptions | [`captions`] | script | TikTok caption |

pub mod captions;
pub mod email;
pub mod headlines;
pub mod script;
pub mod summarize;
pub mod voiceover;
