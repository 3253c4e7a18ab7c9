use super::boot::*;
use super::harvester::*;
use super::hauler::*;
use super::rolesystem::*;
use super::worker::*;

pub enum RoleData {
    Boot(BootRole),
    Harvester(HarvesterRole),
    Hauler(HaulerRole),
    Builder(WorkerRole<BuildPolicy>),
    Upgrader(WorkerRole<UpgradePolicy>),
}

impl RoleData {
    pub fn as_role(&self) -> &dyn Role {
        match self {
            RoleData::Boot(ref data) => data,
            RoleData::Harvester(ref data) => data,
            RoleData::Hauler(ref data) => data,
            RoleData::Builder(ref data) => data,
            RoleData::Upgrader(ref data) => data,
        }
    }
}
