fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    // Server stubs are generated too: downstream test suites spin up an
    // in-process mock gateway rather than faking the wire protocol by hand.
    tonic_build::configure()
        .compile_protos(&["proto/mt5_term_api.proto"], &["proto"])?;
    Ok(())
}
