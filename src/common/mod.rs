pub mod scene_image;

pub use scene_image::SceneImage;
