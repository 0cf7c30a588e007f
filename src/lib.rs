pub mod app;
pub mod eye;
pub mod input;
pub mod population;
pub mod scene;
pub mod util;
