use crate::world::*;
use screeps::Position;

pub trait Positioned {
    fn position(&self) -> Position;
}

impl<T: Positioned + ?Sized> Positioned for &T {
    fn position(&self) -> Position {
        (**self).position()
    }
}

impl Positioned for Position {
    fn position(&self) -> Position {
        *self
    }
}

impl Positioned for (String, Position) {
    fn position(&self) -> Position {
        self.1
    }
}

macro_rules! impl_positioned {
    ($($ty:ty),*) => {
        $(
            impl Positioned for $ty {
                fn position(&self) -> Position {
                    self.pos
                }
            }
        )*
    };
}

impl_positioned!(SourceState, SpawnState, StructureState, ConstructionSiteState, DroppedEnergyState, CreepState, ControllerState);

pub trait FindNearest<T: Sized + Positioned> {
    fn find_nearest_linear(self, start_pos: Position) -> Option<T>
    where
        Self: Sized;

    fn find_in_range(self, start_pos: Position, range: u32) -> Option<T>
    where
        Self: Sized;
}

impl<I> FindNearest<I::Item> for I
where
    I: Iterator,
    I::Item: Positioned,
{
    fn find_nearest_linear(self, start_pos: Position) -> Option<I::Item> {
        self.map(|pos_object| (start_pos.get_range_to(pos_object.position()), pos_object))
            .min_by_key(|(length, _)| *length)
            .map(|(_, pos_object)| pos_object)
    }

    fn find_in_range(self, start_pos: Position, range: u32) -> Option<I::Item> {
        self.filter(|pos_object| start_pos.get_range_to(pos_object.position()) <= range)
            .find_nearest_linear(start_pos)
    }
}
