//! Scenecast Encoder
//!
//! Owns the external video encoder: building its argument list from a codec
//! profile, spawning it on first use, streaming captured stills into its
//! standard input without outrunning it, and closing it so the output file
//! is always playable.
//!
//! # Pipeline Architecture
//!
//! ```text
//! captured PNG ──► write_frame ──► EncoderInput (BufWriter, high-water mark)
//!                                        │
//!                                        ▼
//!                              encoder stdin (image2pipe)
//!                                        │
//!                                        ▼
//!                          {prefix}{timestamp}.mp4 / .mov
//! ```

pub mod profile;
pub mod session;
pub mod writer;

pub use profile::*;
pub use session::*;
pub use writer::*;
