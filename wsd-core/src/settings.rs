//! # Configurações em Arquivo de Propriedades
//!
//! Armazena pares `chave = valor` lidos de um arquivo de propriedades
//! simples. Linhas iniciadas por `//` ou `#` são comentários; linhas sem
//! `=` (ou com mais de um) são ignoradas. O armazém é somente leitura após
//! a carga.
//!
//! ```text
//! // hiperparâmetros de treino
//! windowSize = 25
//! batchSize = 4096
//! learningRate = 0.01
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, WsdError};

/// Armazém imutável de configurações `chave = valor`.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    store: HashMap<String, String>,
}

impl Settings {
    /// Carrega as configurações de um arquivo de propriedades.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&content))
    }

    /// Interpreta o conteúdo de um arquivo de propriedades.
    pub fn parse(content: &str) -> Self {
        let mut store = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with("//") || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split('=').collect();
            if parts.len() == 2 {
                store.insert(parts[0].trim().to_string(), parts[1].trim().to_string());
            }
        }
        Self { store }
    }

    /// Valor bruto associado à chave, se presente.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.store.get(key).map(String::as_str)
    }

    /// Valor da chave convertido para `T`.
    ///
    /// `Ok(None)` para chave ausente; um valor presente mas inconversível é
    /// um erro fatal de configuração.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                WsdError::InvalidInput(format!("valor inválido para a chave '{key}': '{raw}'"))
            }),
        }
    }

    /// Número de chaves carregadas.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Retorna `true` se nenhuma chave foi carregada.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_bad_lines() {
        let settings = Settings::parse(
            "// comentário\n# outro\nwindowSize = 25\nsem igual\na=b=c\nbatchSize=512\n",
        );
        assert_eq!(settings.len(), 2);
        assert_eq!(settings.get("windowSize"), Some("25"));
        assert_eq!(settings.get("batchSize"), Some("512"));
        assert_eq!(settings.get("a"), None);
    }

    #[test]
    fn test_get_parsed() {
        let settings = Settings::parse("windowSize = 25\nlearningRate = 0.05\n");
        assert_eq!(settings.get_parsed::<usize>("windowSize").unwrap(), Some(25));
        assert_eq!(
            settings.get_parsed::<f64>("learningRate").unwrap(),
            Some(0.05)
        );
        assert_eq!(settings.get_parsed::<usize>("ausente").unwrap(), None);
    }

    #[test]
    fn test_get_parsed_invalid_value_is_fatal() {
        let settings = Settings::parse("windowSize = vinte\n");
        assert!(matches!(
            settings.get_parsed::<usize>("windowSize"),
            Err(WsdError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wsd.properties");
        std::fs::write(&path, "epochs = 5\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.get_parsed::<usize>("epochs").unwrap(), Some(5));
    }
}
