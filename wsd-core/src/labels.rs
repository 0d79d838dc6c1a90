//! # Registro de Rótulos (Classes de Sentido)
//!
//! Liga cada id de classe global da rede a uma palavra ambígua e às
//! palavras-sentido que distinguem os seus significados. O arquivo de
//! definição tem uma linha por classe:
//!
//! ```text
//! class_id:palavra:<ignorado>:sentido1,sentido2,...
//! ```
//!
//! Exemplo com duas classes para "bank":
//!
//! ```text
//! 17:bank:n:money,deposit,finance
//! 18:bank:n:river,slope,shore
//! ```
//!
//! Do arquivo derivam dois índices imutáveis após a carga:
//! - `class_id -> entrada` (palavra + sentidos);
//! - `palavra -> ids de classe` na ordem da primeira aparição, sem
//!   duplicatas — é este índice que define quais classes competem entre si
//!   na desambiguação de uma palavra.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, WsdError};

/// Limite fixo de palavras-sentido por classe. Entradas além da quarta são
/// descartadas silenciosamente na carga. É um limite do formato, não uma
/// opção de configuração.
pub const MAX_SENSES: usize = 4;

/// Uma classe de sentido: a palavra ambígua e até [`MAX_SENSES`]
/// palavras-sentido que caracterizam este significado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    /// Id global da classe na saída da rede.
    pub class_id: u32,
    /// A palavra ambígua que esta classe desambigua (minúscula).
    pub headword: String,
    /// Palavras-sentido, na ordem do arquivo, no máximo [`MAX_SENSES`].
    pub senses: Vec<String>,
}

/// Registro imutável de classes de sentido, carregado uma única vez do
/// arquivo de definição junto com o modelo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelRegistry {
    entries: HashMap<u32, LabelEntry>,
    by_headword: HashMap<String, Vec<u32>>,
}

impl LabelRegistry {
    /// Carrega o registro do arquivo de definição de rótulos.
    ///
    /// Qualquer linha que não tenha os quatro campos separados por `:` ou
    /// cujo id de classe não seja um inteiro é um erro fatal de
    /// configuração: o arquivo inteiro é rejeitado, não há recuperação
    /// por linha.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut registry = Self::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            registry.add_line(line, idx + 1)?;
        }
        info!(
            caminho = %path.display(),
            classes = registry.entries.len(),
            palavras = registry.by_headword.len(),
            "registro de rótulos carregado"
        );
        Ok(registry)
    }

    /// Insere uma linha `class_id:palavra:<ignorado>:sentidos` no registro.
    fn add_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 4 {
            return Err(WsdError::MalformedLabel {
                line: line_number,
                reason: format!("esperados 4 campos separados por ':', encontrados {}", parts.len()),
            });
        }
        let class_id: u32 = parts[0].trim().parse().map_err(|_| WsdError::MalformedLabel {
            line: line_number,
            reason: format!("id de classe não numérico: '{}'", parts[0]),
        })?;
        let headword = parts[1].trim().to_lowercase();

        let mut senses: Vec<String> = parts[3]
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        senses.truncate(MAX_SENSES);

        self.entries.insert(
            class_id,
            LabelEntry {
                class_id,
                headword: headword.clone(),
                senses,
            },
        );

        // Primeira aparição define a ordem; ids duplicados são ignorados.
        let ids = self.by_headword.entry(headword).or_default();
        if !ids.contains(&class_id) {
            ids.push(class_id);
        }
        Ok(())
    }

    /// Ids de classe candidatos para uma palavra, na ordem da primeira
    /// aparição no arquivo.
    ///
    /// Falha para palavras nunca registradas; verifique antes com
    /// [`LabelRegistry::is_registered`].
    pub fn classes_for(&self, headword: &str) -> Result<&[u32]> {
        self.by_headword
            .get(&headword.to_lowercase())
            .map(Vec::as_slice)
            .ok_or_else(|| WsdError::UnknownHeadword(headword.to_string()))
    }

    /// Retorna `true` se a palavra possui ao menos uma classe registrada.
    pub fn is_registered(&self, headword: &str) -> bool {
        self.by_headword.contains_key(&headword.to_lowercase())
    }

    /// Entrada completa de uma classe, se existir.
    pub fn entry(&self, class_id: u32) -> Option<&LabelEntry> {
        self.entries.get(&class_id)
    }

    /// Número de classes registradas (uma por linha do arquivo) — a
    /// convenção usada para dimensionar a saída da rede.
    pub fn num_classes(&self) -> usize {
        self.entries.len()
    }

    /// Maior id de classe registrado, para quem precisa do limite estrito
    /// do one-hot em vez da contagem de linhas.
    pub fn max_class_id(&self) -> Option<u32> {
        self.entries.keys().copied().max()
    }

    /// Número de classes registradas (alias de contagem).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Retorna `true` se nenhuma classe foi registrada.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
