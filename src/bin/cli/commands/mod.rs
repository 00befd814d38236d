pub mod add;
pub mod delete;
pub mod due;
pub mod edit;
pub mod list;
pub mod plan;
pub mod review;
pub mod show;
pub mod stats;
