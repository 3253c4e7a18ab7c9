pub mod actions;
pub mod boot;
pub mod data;
pub mod harvester;
pub mod hauler;
pub mod rolesystem;
pub mod worker;
