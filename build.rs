/// Build script for Windows metadata and icon resources

fn main() {
    #[cfg(windows)]
    {
        let mut res = winres::WindowsResource::new();

        res.set_version_info(winres::VersionInfo::PRODUCTVERSION, 0x0000_0001_0000_0000); // 0.1.0.0
        res.set_version_info(winres::VersionInfo::FILEVERSION, 0x0000_0001_0000_0000);

        res.set("ProductName", "MD Reader");
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));
        res.set("FileDescription", "A minimal markdown reader");
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));
        res.set("OriginalFilename", "mdreader.exe");
        res.set("InternalName", "mdreader");

        if std::path::Path::new("icon.ico").exists() {
            res.set_icon("icon.ico");
        }

        // Resource compilation failures should not fail the build.
        if let Err(e) = res.compile() {
            println!("cargo:warning=Failed to compile Windows resources: {}", e);
        }
    }
}
