/// Generation-versus-load assessment shared across the engine.
pub mod balance;
/// Clock samples and fixed-cadence sampling.
pub mod clock;
pub mod draws;
pub mod kpi;
pub mod patterns;
/// Load-shedding ladder and its descriptors.
pub mod shedding;
