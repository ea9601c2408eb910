mod cursor;
mod reader;

pub use self::{
    cursor::{Cursor, DuplicateTimestamps},
    reader::{CsvSettings, PowerUnit, Reader, Reading},
};
