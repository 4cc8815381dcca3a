pub mod cycle;
pub mod documents;
pub mod objects;
pub mod proposals;
pub mod suppliers;
