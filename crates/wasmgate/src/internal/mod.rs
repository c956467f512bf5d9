pub mod configure;
pub mod epoch;
pub mod resource;
pub mod sandbox;
