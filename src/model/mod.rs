pub mod record;
pub mod work_item;
