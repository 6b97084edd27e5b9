pub mod source_item;
pub mod source_lister;
pub mod source_naming;
