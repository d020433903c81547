fn main() {
    // Reproducible builds can pin the stamp via SIMARCH_BUILD_STAMP.
    let stamp = std::env::var("SIMARCH_BUILD_STAMP").unwrap_or_else(|_| {
        let fmt = time::format_description::parse("[year]-[month]-[day] [hour]:[minute] UTC")
            .expect("valid timestamp format");
        time::OffsetDateTime::now_utc()
            .format(&fmt)
            .unwrap_or_else(|_| "unknown".to_string())
    });
    println!("cargo:rustc-env=SIMARCH_BUILD_STAMP={stamp}");
}
