pub mod bootroom;
pub mod bootsource;
pub mod buildroom;
pub mod data;
pub mod harvestsource;
pub mod tasksystem;
pub mod upgradecontroller;
pub mod utility;
