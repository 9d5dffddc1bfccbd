// Domain layer: core models, regions and ports (interfaces).

pub mod model;
pub mod ordered;
pub mod ports;
pub mod region;
