use std::path::PathBuf;

error_chain! {
    links {
        Ptcov(::ptcov::error::Error, ::ptcov::error::ErrorKind);
    }

    foreign_links {
        TomlDe(::toml::de::Error);
        Io(::std::io::Error);
        Json(::serde_json::Error);
        WalkDir(::walkdir::Error);
    }

    errors {
        NoArtifacts(path: PathBuf) {
            description("no coverage artifacts found")
            display("no coverage artifacts found in `{}`", path.display())
        }

        InvalidArgument(name: &'static str, value: String) {
            description("invalid command line argument")
            display("invalid value `{}` for `--{}`", value, name)
        }
    }
}
