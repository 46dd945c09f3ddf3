#![forbid(unsafe_code)]

pub mod arc_text;
pub mod assets;
pub mod compose;
pub mod error;
pub mod export;
pub mod session;
pub mod theme;

pub use arc_text::{CharPlacement, TextEngine, arc_step, placements};
pub use assets::{SourceImage, decode_image, is_image_path, load_source};
pub use compose::{FrameRgba, compose};
pub use error::{HaloError, HaloResult};
pub use export::{copy_to_clipboard, output_path, share, share_url, write_png};
pub use session::{ProcessToken, Session, SessionState};
pub use theme::Theme;
