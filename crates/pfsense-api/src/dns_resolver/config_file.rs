// Unbound include files
//
// Files under the resolver's `conf.d` directory have no form of their own,
// so every operation is a PHP snippet that checks for the file and acts on
// it in the same round trip. Names go through `basename()` on the backend
// so a key can never escape the directory.

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Error;
use crate::models::ConfigFile;
use crate::php;
use crate::resource::Resource;
use crate::session::{SessionClient, reauth_once};

const CONF_DIR: &str = "/var/unbound/conf.d/";

/// Outcome reported by the file snippets.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum FileOutcome {
    Ok {
        #[serde(default)]
        content: String,
    },
    Exists,
    Missing,
}

#[derive(Debug, Deserialize)]
struct ListedFile {
    name: String,
    content: String,
}

fn path_expr(name: &str) -> String {
    format!(
        "$p = {dir} . basename({name});",
        dir = php::literal(CONF_DIR),
        name = php::literal(name),
    )
}

fn read_script(name: &str) -> String {
    format!(
        "{path}\n\
         if (is_file($p)) {{ $result = ['status' => 'ok', 'content' => file_get_contents($p)]; }}\n\
         else {{ $result = ['status' => 'missing']; }}",
        path = path_expr(name),
    )
}

fn create_script(file: &ConfigFile) -> String {
    format!(
        "{path}\n\
         if (file_exists($p)) {{ $result = ['status' => 'exists']; }}\n\
         else {{\n\
         @mkdir({dir}, 0755, true);\n\
         file_put_contents($p, {content});\n\
         $result = ['status' => 'ok', 'content' => file_get_contents($p)];\n\
         }}",
        path = path_expr(&file.name),
        dir = php::literal(CONF_DIR),
        content = php::literal(&file.content),
    )
}

fn update_script(file: &ConfigFile) -> String {
    format!(
        "{path}\n\
         if (!is_file($p)) {{ $result = ['status' => 'missing']; }}\n\
         else {{\n\
         file_put_contents($p, {content});\n\
         $result = ['status' => 'ok', 'content' => file_get_contents($p)];\n\
         }}",
        path = path_expr(&file.name),
        content = php::literal(&file.content),
    )
}

fn delete_script(name: &str) -> String {
    format!(
        "{path}\n\
         if (!is_file($p)) {{ $result = ['status' => 'missing']; }}\n\
         else {{ unlink($p); $result = ['status' => 'ok']; }}",
        path = path_expr(name),
    )
}

fn list_script() -> String {
    format!(
        "$result = [];\n\
         foreach ((glob({dir} . '*') ?: []) as $f) {{\n\
         if (is_file($f)) {{ $result[] = ['name' => basename($f), 'content' => file_get_contents($f)]; }}\n\
         }}",
        dir = php::literal(CONF_DIR),
    )
}

/// CRUD for Unbound include files.
#[derive(Clone)]
pub struct ConfigFiles {
    session: Arc<SessionClient>,
}

impl ConfigFiles {
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    /// Every include file currently on disk.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<ConfigFile>, Error> {
        reauth_once(|| async move {
            let files: Vec<ListedFile> = php::eval(&self.session, &list_script(), cancel).await?;
            debug!(count = files.len(), "listed config files");
            Ok(files
                .into_iter()
                .map(|f| ConfigFile {
                    name: f.name,
                    content: f.content,
                })
                .collect())
        })
        .await
    }

    async fn run(
        &self,
        name: &str,
        script: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigFile, Error> {
        let outcome: FileOutcome = php::eval(&self.session, script, cancel).await?;
        match outcome {
            FileOutcome::Ok { content } => Ok(ConfigFile {
                name: name.to_owned(),
                content,
            }),
            FileOutcome::Exists => Err(Error::Conflict {
                kind: Self::KIND,
                key: name.to_owned(),
            }),
            FileOutcome::Missing => Err(Error::NotFound {
                kind: Self::KIND,
                key: name.to_owned(),
            }),
        }
    }
}

impl Resource for ConfigFiles {
    type Entity = ConfigFile;

    const KIND: &'static str = "config file";

    fn key(entity: &ConfigFile) -> &str {
        &entity.name
    }

    async fn create(
        &self,
        entity: &ConfigFile,
        cancel: &CancellationToken,
    ) -> Result<ConfigFile, Error> {
        let script = create_script(entity);
        let created = reauth_once(|| self.run(&entity.name, &script, cancel)).await?;
        info!(name = %entity.name, "config file created");
        Ok(created)
    }

    async fn read(&self, key: &str, cancel: &CancellationToken) -> Result<ConfigFile, Error> {
        let script = read_script(key);
        reauth_once(|| self.run(key, &script, cancel)).await
    }

    async fn update(
        &self,
        entity: &ConfigFile,
        cancel: &CancellationToken,
    ) -> Result<ConfigFile, Error> {
        let script = update_script(entity);
        let updated = reauth_once(|| self.run(&entity.name, &script, cancel)).await?;
        info!(name = %entity.name, "config file updated");
        Ok(updated)
    }

    async fn delete(&self, key: &str, cancel: &CancellationToken) -> Result<(), Error> {
        let script = delete_script(key);
        reauth_once(|| self.run(key, &script, cancel)).await?;
        info!(name = key, "config file deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn create_script_refuses_existing_file() {
        let script = create_script(&ConfigFile {
            name: "custom.conf".into(),
            content: "server:\n verbosity: 1".into(),
        });
        assert!(script.contains("basename('custom.conf')"));
        assert!(script.contains("if (file_exists($p)) { $result = ['status' => 'exists']; }"));
        assert!(script.contains("file_put_contents($p, 'server:\n verbosity: 1');"));
    }

    #[test]
    fn hostile_name_stays_quoted() {
        let script = read_script("x'); system('id'); ('");
        assert!(script.contains(r"basename('x\'); system(\'id\'); (\'')"));
    }

    #[test]
    fn outcome_tags_decode() {
        let ok: FileOutcome = serde_json::from_str(r#"{"status":"ok","content":"a"}"#).unwrap();
        assert!(matches!(ok, FileOutcome::Ok { content } if content == "a"));

        let exists: Result<FileOutcome, _> = serde_json::from_str(r#"{"status":"exists"}"#);
        assert!(matches!(exists, Ok(FileOutcome::Exists)));

        let deleted: Result<FileOutcome, _> = serde_json::from_str(r#"{"status":"ok"}"#);
        assert!(matches!(deleted, Ok(FileOutcome::Ok { content }) if content.is_empty()));
    }
}
