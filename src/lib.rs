// Datamine Core - static extraction of structured data from minified client bundles
//
// Nothing here executes client code: scripts are parsed with tree-sitter and
// pattern-matched. The fetch/persistence layers live outside this crate and
// talk to it through ClientScript in and BuildSnapshot/BuildDiff out.

pub mod ast;
pub mod chunks;
pub mod constants;
pub mod diff;
pub mod error;
pub mod plugins;
pub mod script;
pub mod snapshot;

pub use chunks::{decode_chunk_manifest, decode_loader_script, ChunkEntry};
pub use diff::{diff_builds, BuildDiff, DiffEntry, DiffKind};
pub use error::{CoerceError, DecodeError, SnapshotError};
pub use plugins::{
    AstParser, AstPlugin, ClientInfo, ClientInfoPlugin, Experiment, ExperimentKind,
    ExperimentsPlugin, PluginOutput, PluginResults, StringsPlugin, Treatment,
};
pub use script::{sniff_batch, sniff_flags, ClientScript, ScriptFlag};
pub use snapshot::{BuildSnapshot, ScriptSummary};

/// The stock plugin set for a full build scrape.
pub fn stock_plugins() -> Vec<Box<dyn AstPlugin>> {
    vec![
        Box::new(StringsPlugin::new()),
        Box::new(ClientInfoPlugin::new()),
        Box::new(ExperimentsPlugin::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Full pipeline: loader manifest decode, extraction, snapshot, diff.
    #[test]
    fn end_to_end_scrape_and_diff() {
        let loader = ClientScript::with_content(
            "web.loader.js",
            r#"t.u = {42: "abcd1234.js", 7: "ff00aa11"};"#,
        );
        let manifest = decode_loader_script(&loader).unwrap();
        assert_eq!(
            manifest
                .iter()
                .map(|e| e.file_name.as_str())
                .collect::<Vec<_>>(),
            vec!["abcd1234.js", "ff00aa11.js"]
        );

        // The fetch layer would pull the manifest files; here they arrive
        // pre-loaded.
        let scripts = vec![
            loader,
            ClientScript::with_content(
                "abcd1234.js",
                r#"window.GLOBAL_ENV = {client_info: {
                    buildNumber: "2002", versionHash: "beef1234", built_at: "1700000000000"
                }};"#,
            ),
            ClientScript::with_content(
                "ff00aa11.js",
                r#"e.exports = {DISCORD: "Discord", WELCOME: "Welcome"};
                   createExperiment({kind: "guild", id: "exp_new", label: "New",
                                    treatments: [{id: 0, label: "control"}]});"#,
            ),
        ];

        let results = AstParser::new(stock_plugins()).run(&scripts);
        let current = BuildSnapshot::finalize(&results, &scripts).unwrap();
        assert_eq!(current.build_number, 2002);
        assert_eq!(current.strings.get("WELCOME").unwrap(), "Welcome");
        assert!(current.experiments.contains_key("exp_new"));

        let mut previous = current.clone();
        previous.build_number = 2001;
        previous.strings.insert("WELCOME".into(), "Hi".into());
        previous.experiments.clear();

        let diff = diff_builds(&previous, &current);
        assert_eq!(diff.strings.len(), 1);
        assert_eq!(diff.strings[0].kind, DiffKind::Changed);
        assert_eq!(diff.experiments.len(), 1);
        assert_eq!(diff.experiments[0].key, "exp_new");
    }
}
