fn main() {
    // Only embed Windows resources on Windows targets
    #[cfg(target_os = "windows")]
    {
        let mut res = winres::WindowsResource::new();
        res.set_icon("assets/icon.ico");
        res.set("FileDescription", "impactscout Player Impact Scoring Tool");
        res.set("ProductName", "impactscout");

        if let Err(e) = res.compile() {
            eprintln!("Warning: Failed to compile Windows resources: {}", e);
        }
    }
}
