use lalrgen::{grammar::Grammar, lalr::Config};
use std::{env, path::PathBuf};

macro_rules! define_tests {
    ($($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = Grammar::from_file(
                &PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
                    .join(concat!("tests/", stringify!($name), ".lll"))
            ).unwrap();
            let tables = Config::new().minimize(false).build(&grammar).unwrap();
            let minimized = Config::new().build(&grammar).unwrap();
            assert!(minimized.num_states() <= tables.num_states());
        }
    )*};
}

define_tests! {
    ambiguous,
    arithmetic,
    dangling_else,
    json,
    min_caml,
    nullable,
}
