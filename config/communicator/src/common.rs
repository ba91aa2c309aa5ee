/// Print only on the root rank of a group.
#[macro_export]
macro_rules! root_println {
    ($group: expr, $($arg:tt)*) => {
        if $group.is_root() {
            println!($($arg)*);
        }
    };
}
