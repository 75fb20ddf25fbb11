#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(star) = csstar::table::parse_star(data, "fuzz.star") else {
        return;
    };
    if let Some(block) = star.particle_block().map(str::to_string) {
        let _ = csstar::table::optics::normalize(star, &block);
    }
});
