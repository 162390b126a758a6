// # View-State Controllers
//
// Controllers hold the parameters a user has selected, validate them, and
// drive a keyed [`crate::Query`] with the committed ones. Presentation code
// reads `state()` or listens on `subscribe()`.
//
// - [`DailyImageController`]: selected APOD date, refetched on every valid change
// - [`RoverPhotoController`]: draft search edited freely, committed on `search()`

pub mod daily_image;
pub mod rover_photos;

pub use daily_image::DailyImageController;
pub use rover_photos::RoverPhotoController;
