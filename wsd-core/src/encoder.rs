//! # Codificador de Amostras em Janela
//!
//! Transforma linhas de corpus `label:palavra1,palavra2,...` em lotes de
//! sequências inteiras de comprimento fixo mais vetores one-hot de rótulo,
//! prontos para o classificador sequencial.
//!
//! ## Convenção de Preenchimento (pré-padding)
//!
//! Sequências mais curtas que `max_sentence_len` são preenchidas com 0 à
//! **esquerda**; mais longas são truncadas também à esquerda. O efeito é
//! sempre preservar a cauda da janela de contexto e descartar o início:
//!
//! ```text
//! max_len = 5
//! [7, 8]          -> [0, 0, 0, 7, 8]
//! [1, 2, 3, 4, 5, 6, 7] -> [3, 4, 5, 6, 7]
//! ```
//!
//! ## Fluxo Infinito de Lotes
//!
//! [`BatchStream`] relê o arquivo do início toda vez que ele se esgota, de
//! modo que um arquivo de tamanho fixo alimenta um treino de quantas épocas
//! forem necessárias. Apenas lotes completos são emitidos: a sobra parcial
//! no fim de cada passada é descartada.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Result, WsdError};
use crate::vocab::Vocabulary;

/// Id sentinela de preenchimento das sequências. Nunca é atribuído a uma
/// palavra pelo vocabulário.
pub const PAD_ID: u32 = 0;

/// Comprimento padrão das sequências de entrada da rede.
pub const DEFAULT_MAX_SENTENCE_LEN: usize = 50;

/// Tamanho padrão do lote de treino.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Uma amostra de treino: o id de classe e as palavras da janela de
/// contexto. Existe apenas durante a montagem do lote.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    /// Id de classe global (rótulo da rede).
    pub label: u32,
    /// Palavras da janela, na ordem do corpus.
    pub words: Vec<String>,
}

/// Um lote codificado: `x` com `batch_size` sequências de ids de
/// comprimento `max_sentence_len`, `y` com as linhas one-hot
/// correspondentes de largura `num_classes`. Reconstruído a cada lote.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    /// Sequências de entrada, já preenchidas/truncadas.
    pub x: Vec<Vec<u32>>,
    /// Rótulos one-hot, uma linha por sequência.
    pub y: Vec<Vec<f32>>,
}

impl EncodedBatch {
    /// Número de amostras no lote.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Retorna `true` para um lote sem amostras.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Interpreta uma linha `label:palavra1,palavra2,...` do corpus.
///
/// A divisão acontece no **primeiro** `:`; a ausência do separador ou um
/// rótulo não numérico é um erro fatal. Palavras vazias (vírgulas
/// consecutivas) são filtradas.
pub fn parse_line(line: &str) -> Result<TrainingSample> {
    let (label_part, words_part) = line
        .split_once(':')
        .ok_or_else(|| WsdError::MalformedSample(line.to_string()))?;
    let label: u32 = label_part
        .trim()
        .parse()
        .map_err(|_| WsdError::MalformedSample(line.to_string()))?;
    let words = words_part
        .split(',')
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect();
    Ok(TrainingSample { label, words })
}

/// Preenche/trunca uma sequência de ids para exatamente `max_len`
/// posições, pela esquerda (a cauda é preservada).
pub fn pad_sequence(ids: &[u32], max_len: usize) -> Vec<u32> {
    if ids.len() >= max_len {
        ids[ids.len() - max_len..].to_vec()
    } else {
        let mut padded = vec![PAD_ID; max_len - ids.len()];
        padded.extend_from_slice(ids);
        padded
    }
}

/// Codifica um rótulo como linha one-hot de largura `num_classes`.
///
/// Um rótulo fora de `[0, num_classes)` é um erro fatal de configuração: o
/// chamador é obrigado a fornecer um `num_classes` que cubra o maior
/// rótulo do corpus.
pub fn one_hot(label: u32, num_classes: usize) -> Result<Vec<f32>> {
    if label as usize >= num_classes {
        return Err(WsdError::LabelOutOfRange { label, num_classes });
    }
    let mut row = vec![0.0; num_classes];
    row[label as usize] = 1.0;
    Ok(row)
}

/// Codificação em modo treino: o vocabulário cresce, toda palavra recebe
/// um id.
pub fn encode_words_train(words: &[String], vocab: &mut Vocabulary) -> Vec<u32> {
    words.iter().map(|w| vocab.lookup_or_assign(w)).collect()
}

/// Codifica um conjunto de amostras em um lote (modo treino).
///
/// Cada amostra vira uma sequência de ids preenchida/truncada para
/// `max_sentence_len` e uma linha one-hot de largura `num_classes`. O
/// vocabulário cresce com as palavras novas.
pub fn encode_batch(
    samples: &[TrainingSample],
    vocab: &mut Vocabulary,
    num_classes: usize,
    max_sentence_len: usize,
) -> Result<EncodedBatch> {
    let mut x = Vec::with_capacity(samples.len());
    let mut y = Vec::with_capacity(samples.len());
    for sample in samples {
        let ids = encode_words_train(&sample.words, vocab);
        x.push(pad_sequence(&ids, max_sentence_len));
        y.push(one_hot(sample.label, num_classes)?);
    }
    Ok(EncodedBatch { x, y })
}

/// Codificação em modo inferência: vocabulário congelado, palavras fora
/// dele são descartadas da sequência.
pub fn encode_words(words: &[String], vocab: &Vocabulary) -> Vec<u32> {
    words.iter().filter_map(|w| vocab.lookup(w)).collect()
}

/// Conta as amostras (linhas não vazias) de um corpus, para o chamador
/// derivar `num_samples` antes do treino.
pub fn count_samples(path: impl AsRef<Path>) -> Result<usize> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut count = 0;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Fluxo preguiçoso, infinito e reiniciável de lotes codificados.
///
/// A cada chamada de [`BatchStream::next_batch`] o fluxo lê linhas até
/// completar `batch_size` amostras. Ao chegar ao fim do arquivo, descarta
/// a sobra parcial e reabre o arquivo do início — o contrato de
/// reinício que permite treinar por múltiplas épocas sobre um arquivo
/// finito. Só lotes completos são emitidos.
pub struct BatchStream {
    path: PathBuf,
    num_classes: usize,
    batch_size: usize,
    max_sentence_len: usize,
    reader: Option<BufReader<File>>,
}

impl BatchStream {
    /// Cria o fluxo. Nenhuma E/S acontece até o primeiro lote ser pedido.
    pub fn new(
        path: impl Into<PathBuf>,
        num_classes: usize,
        batch_size: usize,
        max_sentence_len: usize,
    ) -> Self {
        Self {
            path: path.into(),
            num_classes,
            batch_size,
            max_sentence_len,
            reader: None,
        }
    }

    /// Produz o próximo lote completo, fazendo o vocabulário crescer com
    /// as palavras novas encontradas (modo treino).
    ///
    /// Um arquivo incapaz de preencher um único lote em uma passada
    /// completa resulta em [`WsdError::CorpusTooSmall`] em vez de um laço
    /// infinito silencioso.
    pub fn next_batch(&mut self, vocab: &mut Vocabulary) -> Result<EncodedBatch> {
        let mut samples: Vec<TrainingSample> = Vec::with_capacity(self.batch_size);
        let mut restarts = 0usize;

        loop {
            if self.reader.is_none() {
                self.reader = Some(BufReader::new(File::open(&self.path)?));
            }
            let Some(reader) = self.reader.as_mut() else {
                unreachable!()
            };

            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                // Fim do arquivo: descarta o lote parcial e recomeça.
                self.reader = None;
                samples.clear();
                restarts += 1;
                if restarts >= 2 {
                    return Err(WsdError::CorpusTooSmall {
                        path: self.path.clone(),
                        batch_size: self.batch_size,
                    });
                }
                continue;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            samples.push(parse_line(line)?);

            if samples.len() == self.batch_size {
                return encode_batch(&samples, vocab, self.num_classes, self.max_sentence_len);
            }
        }
    }
}
