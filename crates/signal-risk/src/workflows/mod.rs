pub mod assessments;
pub mod crowd;
pub mod stroke;
