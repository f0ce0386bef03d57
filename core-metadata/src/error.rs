use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Group has no readable files to merge")]
    EmptyGroup,
}

pub type Result<T> = std::result::Result<T, MetadataError>;
