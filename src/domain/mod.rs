// Domain layer: the document/field model, custom type schemas and the ports
// the normalization pipeline talks through.

pub mod model;
pub mod ports;
pub mod schema;
