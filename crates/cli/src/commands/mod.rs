pub mod agent;
pub mod doctor;
pub mod load;
pub mod onboard;
pub mod roles;
