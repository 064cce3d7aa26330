pub mod randomize;
pub mod settings;
