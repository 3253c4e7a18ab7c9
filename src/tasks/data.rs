use super::bootroom::*;
use super::bootsource::*;
use super::buildroom::*;
use super::harvestsource::*;
use super::tasksystem::*;
use super::upgradecontroller::*;

#[derive(Clone, Debug, PartialEq)]
pub enum TaskData {
    BootRoom(BootRoomTask),
    BootSource(BootSourceTask),
    HarvestSource(HarvestSourceTask),
    BuildRoom(BuildRoomTask),
    UpgradeController(UpgradeControllerTask),
}

impl TaskData {
    pub fn as_task(&mut self) -> &mut dyn Task {
        match self {
            TaskData::BootRoom(ref mut data) => data,
            TaskData::BootSource(ref mut data) => data,
            TaskData::HarvestSource(ref mut data) => data,
            TaskData::BuildRoom(ref mut data) => data,
            TaskData::UpgradeController(ref mut data) => data,
        }
    }

    pub fn as_task_ref(&self) -> &dyn Task {
        match self {
            TaskData::BootRoom(ref data) => data,
            TaskData::BootSource(ref data) => data,
            TaskData::HarvestSource(ref data) => data,
            TaskData::BuildRoom(ref data) => data,
            TaskData::UpgradeController(ref data) => data,
        }
    }

    pub fn id(&self) -> String {
        self.as_task_ref().id()
    }
}
