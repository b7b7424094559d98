pub mod job;
pub mod resume;

pub use job::{JobDescription, JobDetails};
pub use resume::{
    DynamicSections, ExperienceEntry, RendererConfig, SkillCategory, StaticSections,
};
