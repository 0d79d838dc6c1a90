//! # Motor de Desambiguação
//!
//! A fachada de inferência do sistema. Recebe a lista de tokens do
//! etiquetador externo, identifica os substantivos ambíguos registrados e
//! escreve em cada um o deslocamento do sentido escolhido pela rede.
//!
//! ## As Três Fases de `wsd`
//!
//! 1. **Agrupamento**: uma única varredura da esquerda para a direita.
//!    Tokens com etiqueta `NN*` cujo texto minúsculo é uma palavra
//!    registrada formam "famílias" por texto; a janela de contexto de cada
//!    família é capturada na **primeira** ocorrência e reaproveitada para
//!    todas as demais — repetições da mesma palavra em uma chamada recebem
//!    o mesmo sentido, com uma única inferência por palavra distinta.
//! 2. **Inferência**: todas as requisições distintas viram um único lote
//!    para o classificador. Sem substantivos ambíguos, nenhuma inferência
//!    acontece e nenhum token é alterado.
//! 3. **Difusão**: o deslocamento resultante é atribuído ao `synid` de
//!    todos os tokens da família.
//!
//! O deslocamento de sentido é `classe_vencedora - menor_classe_candidata`:
//! um índice zero-based dentro do grupo de classes da palavra.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::SequenceClassifier;
use crate::encoder;
use crate::error::{Result, WsdError};
use crate::labels::LabelRegistry;
use crate::token::Token;
use crate::trainer::vocab_path_for;
use crate::vocab::Vocabulary;

/// Prefixo de etiqueta Penn que identifica substantivos (`NN`, `NNS`,
/// `NNP`, `NNPS`).
const NOUN_TAG_PREFIX: &str = "NN";

/// Uma requisição de desambiguação: a palavra ambígua e a sua janela de
/// contexto em minúsculas. Uma por família de ocorrências.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsdRequest {
    /// A palavra a desambiguar (minúscula).
    pub headword: String,
    /// Janela de contexto ao redor da primeira ocorrência.
    pub window: Vec<String>,
}

impl WsdRequest {
    /// Cria uma requisição.
    pub fn new(headword: impl Into<String>, window: Vec<String>) -> Self {
        Self {
            headword: headword.into(),
            window,
        }
    }
}

/// Resultado agregado de uma avaliação sobre amostras rotuladas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Amostras cuja classe vencedora coincidiu com o rótulo esperado.
    pub successes: usize,
    /// Amostras erradas.
    pub failures: usize,
    /// Contagem de erros por palavra — as "palavras-problema" do modelo.
    pub problem_words: HashMap<String, usize>,
}

impl EvaluationReport {
    /// Total de amostras avaliadas.
    pub fn total(&self) -> usize {
        self.successes + self.failures
    }

    /// Taxa de acerto em `[0, 1]` (0 para um relatório vazio).
    pub fn accuracy(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.successes as f64 / self.total() as f64
        }
    }
}

/// Seleciona o id de classe vencedor entre os candidatos: varredura linear
/// que mantém o primeiro máximo (empates ficam com o candidato mais cedo
/// na ordem do arquivo de rótulos).
///
/// Um candidato além da largura da linha de probabilidades é um erro fatal
/// de configuração (a rede foi dimensionada com menos classes do que o
/// registro conhece).
fn best_candidate(probs: &[f32], candidates: &[u32]) -> Result<Option<u32>> {
    let mut best: Option<(u32, f32)> = None;
    for &id in candidates {
        let p = *probs
            .get(id as usize)
            .ok_or(WsdError::LabelOutOfRange {
                label: id,
                num_classes: probs.len(),
            })?;
        if best.map_or(true, |(_, best_p)| p > best_p) {
            best = Some((id, p));
        }
    }
    Ok(best.map(|(id, _)| id))
}

/// Fase de agrupamento: varre os tokens uma vez e monta as famílias de
/// palavras ambíguas com as suas janelas ancoradas na primeira ocorrência.
///
/// Devolve as requisições (na ordem de primeira aparição) e o mapa
/// `palavra -> índices dos tokens da família`.
fn collect_families(
    labels: &LabelRegistry,
    tokens: &[Token],
    window_size: usize,
) -> (Vec<WsdRequest>, HashMap<String, Vec<usize>>) {
    let mut requests = Vec::new();
    let mut families: HashMap<String, Vec<usize>> = HashMap::new();

    for i in 0..tokens.len() {
        // O filtro de etiqueta vem antes da consulta ao registro: um verbo
        // homógrafo de uma palavra registrada nunca é candidato.
        if !tokens[i].tag.starts_with(NOUN_TAG_PREFIX) {
            continue;
        }
        let lwr = tokens[i].text.to_lowercase();
        if !labels.is_registered(&lwr) {
            continue;
        }

        let family = families.entry(lwr.clone()).or_default();
        family.push(i);
        if family.len() == 1 {
            // Primeira ocorrência: captura a janela de contexto.
            let lo = i.saturating_sub(window_size);
            let hi = (i + window_size).min(tokens.len());
            let window = tokens[lo..hi]
                .iter()
                .map(|t| t.text.to_lowercase())
                .collect();
            requests.push(WsdRequest::new(lwr, window));
        }
    }
    (requests, families)
}

/// O motor de desambiguação: classificador, vocabulário e registro de
/// rótulos carregados uma vez e somente leitura a partir daí. Cada chamada
/// de [`DisambiguationEngine::wsd`] é independente e sem estado próprio.
pub struct DisambiguationEngine {
    classifier: SequenceClassifier,
    vocab: Vocabulary,
    labels: LabelRegistry,
}

impl DisambiguationEngine {
    /// Carrega o motor a partir do par modelo/vocabulário e do arquivo de
    /// rótulos. O vocabulário vem de `<modelo>.v`, por convenção de sufixo.
    pub fn load(model_path: impl AsRef<Path>, label_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        info!(modelo = %model_path.display(), "carregando o motor de desambiguação");
        let classifier = SequenceClassifier::load(model_path)?;
        let vocab = Vocabulary::load(vocab_path_for(model_path))?;
        let labels = LabelRegistry::load(label_path)?;
        info!("motor de desambiguação pronto");
        Ok(Self {
            classifier,
            vocab,
            labels,
        })
    }

    /// Monta o motor a partir de componentes já construídos.
    pub fn from_parts(
        classifier: SequenceClassifier,
        vocab: Vocabulary,
        labels: LabelRegistry,
    ) -> Self {
        Self {
            classifier,
            vocab,
            labels,
        }
    }

    /// Registro de rótulos em uso.
    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    /// Vocabulário em uso.
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Desambigua os substantivos ambíguos da lista de tokens, escrevendo o
    /// deslocamento do sentido no `synid` de cada token afetado.
    ///
    /// A janela de contexto de cada palavra vai de `i - window_size` a
    /// `i + window_size` (exclusivo), recortada nos limites da lista, onde
    /// `i` é a posição da primeira ocorrência.
    pub fn wsd(&self, tokens: &mut [Token], window_size: usize) -> Result<()> {
        let (requests, families) = collect_families(&self.labels, tokens, window_size);
        if requests.is_empty() {
            return Ok(());
        }

        let results = self.predict(&requests)?;
        for (headword, synid) in results {
            if let Some(indices) = families.get(&headword) {
                for &i in indices {
                    tokens[i].synid = Some(synid);
                }
            }
        }
        Ok(())
    }

    /// Executa uma passada de inferência em lote e reduz cada linha de
    /// probabilidades ao deslocamento de sentido da palavra.
    ///
    /// Devolve um par `(palavra, deslocamento)` por requisição, na mesma
    /// ordem. Uma palavra sem lista de candidatos recebe `-1` (recuo
    /// defensivo); uma contagem de resultados divergente do classificador é
    /// fatal.
    pub fn predict(&self, requests: &[WsdRequest]) -> Result<Vec<(String, i32)>> {
        let rows = self.predict_rows(requests)?;

        let mut results = Vec::with_capacity(requests.len());
        for (request, probs) in requests.iter().zip(&rows) {
            if !self.labels.is_registered(&request.headword) {
                results.push((request.headword.clone(), -1));
                continue;
            }
            let candidates = self.labels.classes_for(&request.headword)?;
            let base = candidates.iter().copied().min();
            let offset = match (best_candidate(probs, candidates)?, base) {
                (Some(best), Some(base)) => best as i32 - base as i32,
                _ => -1,
            };
            results.push((request.headword.clone(), offset));
        }
        Ok(results)
    }

    /// Codifica as janelas (modo inferência, vocabulário congelado), roda o
    /// classificador uma única vez e valida a contagem de resultados.
    fn predict_rows(&self, requests: &[WsdRequest]) -> Result<Vec<Vec<f32>>> {
        let max_len = self.classifier.config().max_sentence_len;
        let batch: Vec<Vec<u32>> = requests
            .iter()
            .map(|request| {
                let ids = encoder::encode_words(&request.window, &self.vocab);
                encoder::pad_sequence(&ids, max_len)
            })
            .collect();

        let rows = self.classifier.predict(&batch)?;
        if rows.len() != requests.len() {
            return Err(WsdError::ClassifierContract {
                expected: requests.len(),
                got: rows.len(),
            });
        }
        Ok(rows)
    }

    /// Avalia o modelo sobre um arquivo de amostras rotuladas no formato
    /// `palavra:rotulo:palavra1,palavra2,...`.
    ///
    /// A classe vencedora entre as candidatas da palavra é comparada com o
    /// rótulo esperado; os erros são agregados por palavra no relatório.
    pub fn evaluate(&self, samples_path: impl AsRef<Path>) -> Result<EvaluationReport> {
        let samples_path = samples_path.as_ref();
        let reader = BufReader::new(File::open(samples_path)?);

        let mut expected = Vec::new();
        let mut requests = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(3, ':');
            let (word, label, words) = match (parts.next(), parts.next(), parts.next()) {
                (Some(word), Some(label), Some(words)) => (word, label, words),
                _ => return Err(WsdError::MalformedSample(line.to_string())),
            };
            let label: u32 = label
                .trim()
                .parse()
                .map_err(|_| WsdError::MalformedSample(line.to_string()))?;
            let window: Vec<String> = words
                .split(',')
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect();
            expected.push(label);
            requests.push(WsdRequest::new(word.trim().to_lowercase(), window));
        }

        info!(
            caminho = %samples_path.display(),
            amostras = requests.len(),
            "avaliando o modelo"
        );
        let rows = self.predict_rows(&requests)?;

        let mut report = EvaluationReport::default();
        for ((request, probs), label) in requests.iter().zip(&rows).zip(&expected) {
            let candidates = self.labels.classes_for(&request.headword)?;
            if best_candidate(probs, candidates)? == Some(*label) {
                report.successes += 1;
            } else {
                report.failures += 1;
                *report
                    .problem_words
                    .entry(request.headword.clone())
                    .or_insert(0) += 1;
            }
        }
        info!(
            acertos = report.successes,
            erros = report.failures,
            "avaliação concluída"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierConfig;

    fn registry(content: &str) -> LabelRegistry {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, content).unwrap();
        LabelRegistry::load(&path).unwrap()
    }

    fn bank_engine() -> DisambiguationEngine {
        // Duas classes para "bank": 0 = financeiro, 1 = margem de rio.
        let labels = registry("0:bank:n:money,deposit\n1:bank:n:river,slope\n");
        let mut vocab = Vocabulary::new();
        for word in ["the", "bank", "of", "river", "money", "was", "steep"] {
            vocab.lookup_or_assign(word);
        }
        let mut config = ClassifierConfig::new(vocab.max_id() as usize + 1, 2);
        config.hidden_size = 8;
        config.max_sentence_len = 6;
        config.dropout = 0.0;
        let classifier = SequenceClassifier::new(config).unwrap();
        DisambiguationEngine::from_parts(classifier, vocab, labels)
    }

    #[test]
    fn test_best_candidate_picks_highest_probability() {
        let probs = vec![0.1, 0.2, 0.7];
        assert_eq!(best_candidate(&probs, &[1, 2]).unwrap(), Some(2));
        assert_eq!(best_candidate(&probs, &[0, 1]).unwrap(), Some(1));
    }

    #[test]
    fn test_best_candidate_tie_keeps_first() {
        let probs = vec![0.5, 0.5];
        assert_eq!(best_candidate(&probs, &[0, 1]).unwrap(), Some(0));
        assert_eq!(best_candidate(&probs, &[1, 0]).unwrap(), Some(1));
    }

    #[test]
    fn test_best_candidate_out_of_range_is_fatal() {
        let probs = vec![0.5, 0.5];
        assert!(matches!(
            best_candidate(&probs, &[5]),
            Err(WsdError::LabelOutOfRange { label: 5, .. })
        ));
    }

    #[test]
    fn test_best_candidate_empty_candidates() {
        let probs = vec![0.5, 0.5];
        assert_eq!(best_candidate(&probs, &[]).unwrap(), None);
    }

    #[test]
    fn test_collect_families_one_request_per_distinct_word() {
        let labels = registry("0:bank:n:money\n1:bank:n:river\n");
        let tokens = vec![
            Token::new("the", "DT"),
            Token::new("big", "JJ"),
            Token::new("bank", "NN"),
            Token::new("near", "IN"),
            Token::new("the", "DT"),
            Token::new("river", "NN"),
            Token::new("and", "CC"),
            Token::new("Bank", "NN"),
        ];

        let (requests, families) = collect_families(&labels, &tokens, 2);
        // Duas ocorrências de "bank", uma única requisição.
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].headword, "bank");
        assert_eq!(families["bank"], vec![2, 7]);
        // Janela ancorada na primeira ocorrência (posição 2, raio 2).
        assert_eq!(requests[0].window, vec!["the", "big", "bank", "near"]);
    }

    #[test]
    fn test_collect_families_tag_filter_comes_first() {
        let labels = registry("0:bank:n:money\n");
        let tokens = vec![Token::new("bank", "VB"), Token::new("bank", "NN")];

        let (requests, families) = collect_families(&labels, &tokens, 3);
        assert_eq!(requests.len(), 1);
        // O verbo nunca entra na família.
        assert_eq!(families["bank"], vec![1]);
    }

    #[test]
    fn test_collect_families_window_clipped_at_bounds() {
        let labels = registry("0:bank:n:money\n");
        let tokens = vec![Token::new("bank", "NN"), Token::new("steep", "JJ")];

        let (requests, _) = collect_families(&labels, &tokens, 10);
        assert_eq!(requests[0].window, vec!["bank", "steep"]);
    }

    #[test]
    fn test_wsd_broadcasts_same_sense_to_family() {
        let engine = bank_engine();
        let mut tokens = vec![
            Token::new("the", "DT"),
            Token::new("bank", "NN"),
            Token::new("of", "IN"),
            Token::new("the", "DT"),
            Token::new("river", "NN"),
            Token::new("was", "VBD"),
            Token::new("steep", "JJ"),
            Token::new("bank", "NNS"),
        ];

        engine.wsd(&mut tokens, 3).unwrap();

        let first = tokens[1].synid.expect("primeira ocorrência desambiguada");
        let second = tokens[7].synid.expect("segunda ocorrência desambiguada");
        assert_eq!(first, second, "a família inteira recebe o mesmo sentido");
        assert!((0..2).contains(&first), "deslocamento zero-based dentro do grupo");
        // "river" tem etiqueta NN mas não está registrado: intocado.
        assert_eq!(tokens[4].synid, None);
    }

    #[test]
    fn test_wsd_without_ambiguous_nouns_touches_nothing() {
        let engine = bank_engine();
        let mut tokens = vec![
            Token::new("it", "PRP"),
            Token::new("rains", "VBZ"),
            // Palavra registrada com etiqueta de verbo: fora do filtro.
            Token::new("bank", "VB"),
        ];

        engine.wsd(&mut tokens, 3).unwrap();
        assert!(tokens.iter().all(|t| t.synid.is_none()));
    }

    #[test]
    fn test_predict_offset_is_relative_to_smallest_candidate() {
        // Classes 7 e 8 para "bass": o deslocamento é sempre best - 7.
        let labels = registry(
            "0:pad0:n:x\n1:pad1:n:x\n2:pad2:n:x\n3:pad3:n:x\n4:pad4:n:x\n5:pad5:n:x\n6:pad6:n:x\n7:bass:n:fish,water\n8:bass:n:music,guitar\n",
        );
        let mut vocab = Vocabulary::new();
        for word in ["deep", "bass", "sound"] {
            vocab.lookup_or_assign(word);
        }
        let mut config = ClassifierConfig::new(vocab.max_id() as usize + 1, 9);
        config.hidden_size = 8;
        config.max_sentence_len = 4;
        config.dropout = 0.0;
        let classifier = SequenceClassifier::new(config).unwrap();
        let engine = DisambiguationEngine::from_parts(classifier, vocab, labels);

        let requests = vec![WsdRequest::new(
            "bass",
            vec!["deep".to_string(), "bass".to_string(), "sound".to_string()],
        )];
        let results = engine.predict(&requests).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "bass");
        assert!((0..2).contains(&results[0].1));
    }

    #[test]
    fn test_predict_unregistered_headword_falls_back() {
        let engine = bank_engine();
        let requests = vec![WsdRequest::new("mole", vec!["the".to_string()])];
        let results = engine.predict(&requests).unwrap();
        assert_eq!(results[0], ("mole".to_string(), -1));
    }

    #[test]
    fn test_evaluate_reports_problem_words() {
        let engine = bank_engine();
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples.txt");
        // Rótulos 0 e 1: exatamente um dos dois está errado para cada
        // janela, então o relatório tem um acerto e um erro.
        std::fs::write(
            &samples,
            "bank:0:the,bank,of,money\nbank:1:the,bank,of,money\n",
        )
        .unwrap();

        let report = engine.evaluate(&samples).unwrap();
        assert_eq!(report.total(), 2);
        assert_eq!(report.successes, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.problem_words.get("bank"), Some(&1));
        assert!((report.accuracy() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_evaluate_rejects_malformed_sample() {
        let engine = bank_engine();
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples.txt");
        std::fs::write(&samples, "bank:semrotulo\n").unwrap();

        let err = engine.evaluate(&samples).unwrap_err();
        assert!(matches!(err, WsdError::MalformedSample(_)));
    }
}
