// Sprout - multi-tenancy for Rust web applications
//
// This library re-exports the Sprout member crates: the core tenancy engine
// and, behind the `bud` feature, the per-tenant configuration store.

// Re-export the core engine
pub use sprout_core::*;

// Re-export the Bud config store
#[cfg(feature = "bud")]
pub use sprout_bud;

// Prelude for common imports
pub mod prelude {
    pub use sprout_core::prelude::*;

    #[cfg(feature = "bud")]
    pub use sprout_bud::prelude::*;
}
