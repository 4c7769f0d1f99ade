pub mod reader;
pub mod utils;

pub use reader::{read_workbook, SheetData};
pub use utils::load_file_from_url;
