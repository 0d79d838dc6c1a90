//! # Vocabulário Palavra → Id
//!
//! Mapeamento bidirecional entre palavras (minúsculas) e ids inteiros
//! densos, usado para converter janelas de contexto em sequências de
//! inteiros que a rede neural consome.
//!
//! ## Ciclo de Vida
//!
//! 1. **Treino**: o vocabulário cresce conforme palavras novas aparecem no
//!    corpus (`lookup_or_assign`). Cada palavra nova recebe o próximo id
//!    livre, começando em 1.
//! 2. **Persistência**: gravado como linhas `palavra,id` ao lado do modelo.
//! 3. **Inferência**: carregado e tratado como imutável. Palavras fora do
//!    vocabulário são simplesmente descartadas pelo chamador (`lookup`
//!    devolve `None`) — essa é a política definida, não um erro.
//!
//! O id 0 é reservado como sentinela de preenchimento (padding) das
//! sequências e nunca é atribuído a uma palavra.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::encoder;
use crate::error::{Result, WsdError};

/// Mapeamento palavra → id com atribuição densa a partir de 1.
///
/// As chaves são sempre normalizadas para minúsculas, tanto na atribuição
/// quanto na consulta. Não há suporte a mutação concorrente: o vocabulário
/// cresce apenas a partir do laço único de treino.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    word2id: HashMap<String, u32>,
}

impl Vocabulary {
    /// Cria um vocabulário vazio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Número de palavras registradas.
    pub fn len(&self) -> usize {
        self.word2id.len()
    }

    /// Retorna `true` se nenhuma palavra foi registrada ainda.
    pub fn is_empty(&self) -> bool {
        self.word2id.is_empty()
    }

    /// Devolve o id da palavra, atribuindo o próximo id livre se for nova.
    ///
    /// Exclusivo da fase de treino. Ids são estritamente crescentes por
    /// palavra nova e idempotentes para palavras já vistas.
    pub fn lookup_or_assign(&mut self, word: &str) -> u32 {
        let key = word.to_lowercase();
        if let Some(&id) = self.word2id.get(&key) {
            return id;
        }
        let id = self.word2id.len() as u32 + 1;
        self.word2id.insert(key, id);
        id
    }

    /// Consulta somente leitura, usada na inferência.
    ///
    /// `None` significa palavra fora do vocabulário: o chamador a descarta
    /// da janela de contexto em vez de falhar.
    pub fn lookup(&self, word: &str) -> Option<u32> {
        self.word2id.get(&word.to_lowercase()).copied()
    }

    /// Maior id atribuído até agora (0 para um vocabulário vazio).
    ///
    /// A camada de embedding do classificador é dimensionada como
    /// `max_id() + 1`, de modo a cobrir todos os ids mais o sentinela 0.
    pub fn max_id(&self) -> u32 {
        self.word2id.values().copied().max().unwrap_or(0)
    }

    /// Grava o vocabulário como linhas `palavra,id`.
    ///
    /// Palavras vazias são puladas. A ordem das linhas não é garantida —
    /// a releitura é feita por chave, não por posição.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        for (word, id) in &self.word2id {
            if word.is_empty() {
                continue;
            }
            writeln!(writer, "{word},{id}")?;
        }
        writer.flush()?;
        info!(caminho = %path.display(), palavras = self.len(), "vocabulário gravado");
        Ok(())
    }

    /// Carrega um vocabulário persistido por [`Vocabulary::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut word2id = HashMap::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (word, id) = line.rsplit_once(',').ok_or_else(|| WsdError::MalformedVocab {
                line: idx + 1,
                content: line.to_string(),
            })?;
            let id: u32 = id.trim().parse().map_err(|_| WsdError::MalformedVocab {
                line: idx + 1,
                content: line.to_string(),
            })?;
            word2id.insert(word.to_string(), id);
        }
        info!(caminho = %path.display(), palavras = word2id.len(), "vocabulário carregado");
        Ok(Self { word2id })
    }

    /// Constrói o vocabulário varrendo um corpus `label:palavra1,palavra2,...`.
    ///
    /// Cada palavra recebe um id denso na ordem da primeira aparição. É o
    /// passo de contabilidade que fecha o vocabulário antes do treino
    /// dimensionar a camada de embedding.
    pub fn build_from_corpus(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut vocab = Self::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let sample = encoder::parse_line(line)?;
            for word in &sample.words {
                vocab.lookup_or_assign(word);
            }
        }
        info!(caminho = %path.display(), palavras = vocab.len(), "vocabulário construído do corpus");
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_dense_and_start_at_one() {
        let mut vocab = Vocabulary::new();
        assert_eq!(vocab.lookup_or_assign("rio"), 1);
        assert_eq!(vocab.lookup_or_assign("banco"), 2);
        assert_eq!(vocab.lookup_or_assign("dinheiro"), 3);
        assert_eq!(vocab.max_id(), 3);
    }

    #[test]
    fn test_lookup_or_assign_is_idempotent() {
        let mut vocab = Vocabulary::new();
        let primeiro = vocab.lookup_or_assign("banco");
        let segundo = vocab.lookup_or_assign("banco");
        assert_eq!(primeiro, segundo);
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn test_lookup_normalizes_case() {
        let mut vocab = Vocabulary::new();
        vocab.lookup_or_assign("Banco");
        assert_eq!(vocab.lookup("banco"), Some(1));
        assert_eq!(vocab.lookup("BANCO"), Some(1));
    }

    #[test]
    fn test_lookup_missing_word_is_none() {
        let vocab = Vocabulary::new();
        assert_eq!(vocab.lookup("inexistente"), None);
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut vocab = Vocabulary::new();
        vocab.lookup_or_assign("rio");
        vocab.lookup_or_assign("banco");
        vocab.lookup_or_assign("margem");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        vocab.save(&path).unwrap();

        let reloaded = Vocabulary::load(&path).unwrap();
        assert_eq!(reloaded.len(), vocab.len());
        for word in ["rio", "banco", "margem"] {
            assert_eq!(reloaded.lookup(word), vocab.lookup(word));
        }
    }

    #[test]
    fn test_load_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        std::fs::write(&path, "banco,1\nsem-virgula\n").unwrap();

        let err = Vocabulary::load(&path).unwrap_err();
        assert!(matches!(err, WsdError::MalformedVocab { line: 2, .. }));
    }

    #[test]
    fn test_build_from_corpus_first_seen_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, "0:rio,banco\n1:banco,dinheiro\n").unwrap();

        let vocab = Vocabulary::build_from_corpus(&path).unwrap();
        assert_eq!(vocab.lookup("rio"), Some(1));
        assert_eq!(vocab.lookup("banco"), Some(2));
        assert_eq!(vocab.lookup("dinheiro"), Some(3));
    }
}
