mod classification;
mod models;

pub use classification::{FestivalClassifier, TabListing};
pub use models::{
    ClassifiedFestival, Festival, FestivalKind, FestivalPhase, FestivalStatus, NewFestival,
};
