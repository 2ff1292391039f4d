pub mod region_set;

// re-export for cleaner imports
pub use self::region_set::RegionSet;
