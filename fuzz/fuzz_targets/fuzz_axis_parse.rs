#![no_main]
use libfuzzer_sys::fuzz_target;
use scanner_traits::Axis;

fuzz_target!(|data: &str| {
    // A parsed axis must print back to a name that parses to itself.
    if let Ok(axis) = data.parse::<Axis>() {
        assert_eq!(axis.as_str().parse::<Axis>(), Ok(axis));
    }
});
