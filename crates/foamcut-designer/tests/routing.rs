#[path = "routing/assembly.rs"]
mod assembly;
#[path = "routing/jobs.rs"]
mod jobs;
#[path = "routing/kerf.rs"]
mod kerf;
#[path = "routing/stretch.rs"]
mod stretch;
