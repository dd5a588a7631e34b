pub mod alert;
pub mod fire_extinguisher;
pub mod maintenance_item;
pub mod maintenance_note;
pub mod smoke_detector;
