pub mod deadline;
pub mod encode_subject_use_case;
pub mod merge_class_use_case;
pub mod pipeline_error;
pub mod pipeline_settings;
pub mod workspace;
