// Domain layer: core models and ports (interfaces). Concrete HTTP, font and
// filesystem implementations live under core/ and config/.

pub mod model;
pub mod ports;
