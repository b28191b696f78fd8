fn main() {
    println!("cargo:rerun-if-env-changed=POWERGUARD_CONFIG_JSON");

    // Host builds (tests, simulation) have no ESP-IDF toolchain to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
