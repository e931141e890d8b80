//! SeaORM entity models
//!
//! Database entities for PortraitForge

mod output_image;
mod pack;
mod pack_prompt;
mod portrait_model;

pub use portrait_model::{
    Entity as PortraitModelEntity,
    Model as PortraitModel,
    ActiveModel as PortraitModelActiveModel,
    Column as PortraitModelColumn,
    Ethnicity,
    EyeColor,
    JobStatus,
    SubjectType,
};

pub use output_image::{
    Entity as OutputImageEntity,
    Model as OutputImage,
    ActiveModel as OutputImageActiveModel,
    Column as OutputImageColumn,
};

pub use pack::{
    Entity as PackEntity,
    Model as Pack,
    ActiveModel as PackActiveModel,
    Column as PackColumn,
};

pub use pack_prompt::{
    Entity as PackPromptEntity,
    Model as PackPrompt,
    ActiveModel as PackPromptActiveModel,
    Column as PackPromptColumn,
};
