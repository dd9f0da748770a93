use shadow_rs::ShadowBuilder;

fn main() {
    // Build metadata backing `--version` and `pkg_version()`
    ShadowBuilder::builder()
        .build()
        .expect("Failed to generate build metadata");
}
