//! Image loading and classifier preprocessing.

mod loader;
mod preprocess;

pub use loader::{
    ImageSource, LoadedImage, decode_base64, load_from_base64, load_from_path, load_image,
};
pub use preprocess::preprocess;
