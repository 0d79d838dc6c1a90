//! # Classificador Sequencial (backend candle)
//!
//! Encapsula a capacidade delegada de "treinar um classificador sequencial
//! sobre janelas de tokens codificadas como inteiros". A arquitetura é a
//! clássica para este problema:
//!
//! 1. **Embedding** (`max_features` ids → `hidden_size` dimensões);
//! 2. **LSTM** com estado oculto de `hidden_size` (usamos o último estado);
//! 3. **Densa** projetando para `num_classes` logits;
//! 4. **Softmax** na predição.
//!
//! O treino usa entropia cruzada contra as linhas one-hot e o otimizador
//! adaptativo AdamW. Dropout é aplicado sobre a saída do embedding e do
//! LSTM apenas durante o treino.
//!
//! O artefato persistido é um blob binário único contendo a configuração e
//! os tensores de peso — opaco para o resto do sistema, que só interage com
//! `save`/`load`/`fit`/`predict`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use candle_core::{D, DType, Device, Tensor};
use candle_nn::{
    embedding, linear, lstm, ops, AdamW, Embedding, LSTMConfig, Linear, Module, Optimizer,
    ParamsAdamW, VarBuilder, VarMap, LSTM, RNN,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::encoder::BatchStream;
use crate::error::{Result, WsdError};
use crate::vocab::Vocabulary;

/// Taxa de dropout aplicada durante o treino.
pub const DEFAULT_DROPOUT: f32 = 0.2;

/// Versão do formato do artefato binário.
const ARTIFACT_VERSION: u32 = 1;

/// Hiperparâmetros que definem a arquitetura e o treino do classificador.
///
/// A configuração viaja dentro do artefato salvo, de modo que `load`
/// reconstrói o modelo sem nenhum parâmetro externo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Número de ids de entrada distintos (`max_id` do vocabulário + 1,
    /// cobrindo o sentinela 0).
    pub max_features: usize,
    /// Dimensão do embedding e do estado oculto do LSTM.
    pub hidden_size: usize,
    /// Número de classes de saída.
    pub num_classes: usize,
    /// Comprimento fixo das sequências de entrada.
    pub max_sentence_len: usize,
    /// Taxa de aprendizado do otimizador.
    pub learning_rate: f64,
    /// Taxa de dropout no treino.
    pub dropout: f32,
}

impl ClassifierConfig {
    /// Configuração com os valores usuais para os demais hiperparâmetros.
    pub fn new(max_features: usize, num_classes: usize) -> Self {
        Self {
            max_features,
            num_classes,
            hidden_size: 100,
            max_sentence_len: crate::encoder::DEFAULT_MAX_SENTENCE_LEN,
            learning_rate: 0.01,
            dropout: DEFAULT_DROPOUT,
        }
    }
}

/// Tensor nomeado dentro do artefato persistido.
#[derive(Serialize, Deserialize)]
struct SavedTensor {
    name: String,
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Conteúdo completo do artefato binário do modelo.
#[derive(Serialize, Deserialize)]
struct SavedModel {
    version: u32,
    config: ClassifierConfig,
    tensors: Vec<SavedTensor>,
}

/// O classificador sequencial treinável.
///
/// Todo o estado (pesos) vive no `VarMap`; as camadas são vistas sobre
/// esses pesos. O dispositivo é sempre a CPU — o fluxo inteiro do sistema
/// é síncrono e de thread única.
pub struct SequenceClassifier {
    config: ClassifierConfig,
    device: Device,
    varmap: VarMap,
    embedding: Embedding,
    lstm: LSTM,
    dense: Linear,
}

impl SequenceClassifier {
    /// Constrói o modelo com pesos recém-inicializados.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        if config.max_features == 0
            || config.hidden_size == 0
            || config.num_classes == 0
            || config.max_sentence_len == 0
        {
            return Err(WsdError::InvalidInput(
                "configuração do classificador com dimensão zero".to_string(),
            ));
        }
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let embedding = embedding(config.max_features, config.hidden_size, vb.pp("embedding"))?;
        let lstm = lstm(
            config.hidden_size,
            config.hidden_size,
            LSTMConfig::default(),
            vb.pp("lstm"),
        )?;
        let dense = linear(config.hidden_size, config.num_classes, vb.pp("dense"))?;
        Ok(Self {
            config,
            device,
            varmap,
            embedding,
            lstm,
            dense,
        })
    }

    /// Configuração (imutável) deste modelo.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Passo direto: sequências de ids → logits por classe.
    fn forward(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let mut hidden = self.embedding.forward(xs)?;
        if train && self.config.dropout > 0.0 {
            hidden = ops::dropout(&hidden, self.config.dropout)?;
        }
        let states = self.lstm.seq(&hidden)?;
        let mut last = match states.last() {
            Some(state) => state.h().clone(),
            None => {
                return Err(candle_core::Error::Msg(
                    "sequência de entrada vazia".to_string(),
                ))
            }
        };
        if train && self.config.dropout > 0.0 {
            last = ops::dropout(&last, self.config.dropout)?;
        }
        self.dense.forward(&last)
    }

    /// Converte linhas já preenchidas em um tensor `(lote, comprimento)`.
    fn batch_to_tensor(&self, rows: &[Vec<u32>]) -> Result<Tensor> {
        let len = self.config.max_sentence_len;
        let mut flat = Vec::with_capacity(rows.len() * len);
        for row in rows {
            if row.len() != len {
                return Err(WsdError::InvalidInput(format!(
                    "sequência de comprimento {} onde o modelo espera {len}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }
        Ok(Tensor::from_vec(flat, (rows.len(), len), &self.device)?)
    }

    /// Converte as linhas one-hot em um tensor `(lote, classes)`.
    fn labels_to_tensor(&self, rows: &[Vec<f32>]) -> Result<Tensor> {
        let classes = self.config.num_classes;
        let mut flat = Vec::with_capacity(rows.len() * classes);
        for row in rows {
            if row.len() != classes {
                return Err(WsdError::InvalidInput(format!(
                    "linha one-hot de largura {} onde o modelo espera {classes}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }
        Ok(Tensor::from_vec(flat, (rows.len(), classes), &self.device)?)
    }

    /// Treina o modelo consumindo lotes do fluxo.
    ///
    /// Cada época consome `steps_per_epoch` lotes completos; o vocabulário
    /// compartilhado cresce durante a codificação (modo treino). A perda é
    /// a entropia cruzada média do lote contra as linhas one-hot.
    pub fn fit(
        &mut self,
        stream: &mut BatchStream,
        vocab: &mut Vocabulary,
        steps_per_epoch: usize,
        epochs: usize,
    ) -> Result<()> {
        if steps_per_epoch == 0 {
            return Err(WsdError::InvalidInput(
                "steps_per_epoch deve ser ao menos 1 (num_samples menor que o lote?)".to_string(),
            ));
        }
        let mut optimizer = AdamW::new(
            self.varmap.all_vars(),
            ParamsAdamW {
                lr: self.config.learning_rate,
                ..Default::default()
            },
        )?;

        for epoch in 0..epochs {
            let mut loss_sum = 0.0f64;
            let mut correct = 0.0f64;
            let mut seen = 0usize;

            for _ in 0..steps_per_epoch {
                let batch = stream.next_batch(vocab)?;
                let xs = self.batch_to_tensor(&batch.x)?;
                let ys = self.labels_to_tensor(&batch.y)?;

                let logits = self.forward(&xs, true)?;
                let log_probs = ops::log_softmax(&logits, D::Minus1)?;
                let loss = log_probs
                    .mul(&ys)?
                    .sum_all()?
                    .affine(-1.0 / batch.len() as f64, 0.0)?;
                optimizer.backward_step(&loss)?;

                loss_sum += loss.to_scalar::<f32>()? as f64;
                let predicted = logits.argmax(D::Minus1)?;
                let expected = ys.argmax(D::Minus1)?;
                correct += predicted
                    .eq(&expected)?
                    .to_dtype(DType::F32)?
                    .sum_all()?
                    .to_scalar::<f32>()? as f64;
                seen += batch.len();
            }

            info!(
                epoca = epoch + 1,
                epocas = epochs,
                perda = loss_sum / steps_per_epoch as f64,
                acuracia = correct / seen.max(1) as f64,
                "época concluída"
            );
        }
        Ok(())
    }

    /// Prediz a distribuição de probabilidade por classe para cada
    /// sequência do lote.
    ///
    /// Devolve exatamente uma linha de largura `num_classes` por sequência
    /// de entrada, com probabilidades que somam 1.
    pub fn predict(&self, batch: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let xs = self.batch_to_tensor(batch)?;
        let logits = self.forward(&xs, false)?;
        let probs = ops::softmax(&logits, D::Minus1)?;
        Ok(probs.to_vec2::<f32>()?)
    }

    /// Grava o artefato binário (configuração + pesos) em `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut tensors = Vec::new();
        {
            let data = self.varmap.data().lock().unwrap();
            for (name, var) in data.iter() {
                let tensor = var.as_tensor();
                tensors.push(SavedTensor {
                    name: name.clone(),
                    shape: tensor.dims().to_vec(),
                    data: tensor.flatten_all()?.to_vec1::<f32>()?,
                });
            }
        }
        tensors.sort_by(|a, b| a.name.cmp(&b.name));

        let saved = SavedModel {
            version: ARTIFACT_VERSION,
            config: self.config.clone(),
            tensors,
        };
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &saved)?;
        info!(caminho = %path.display(), "modelo gravado");
        Ok(())
    }

    /// Reconstrói um modelo a partir de um artefato gravado por
    /// [`SequenceClassifier::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let saved: SavedModel = bincode::deserialize_from(reader)?;
        if saved.version != ARTIFACT_VERSION {
            return Err(WsdError::InvalidArtifact(format!(
                "versão de artefato {} não suportada",
                saved.version
            )));
        }

        let classifier = Self::new(saved.config)?;
        {
            let data = classifier.varmap.data().lock().unwrap();
            if data.len() != saved.tensors.len() {
                return Err(WsdError::InvalidArtifact(format!(
                    "artefato com {} tensores, arquitetura espera {}",
                    saved.tensors.len(),
                    data.len()
                )));
            }
            for tensor in saved.tensors {
                let var = data.get(&tensor.name).ok_or_else(|| {
                    WsdError::InvalidArtifact(format!("tensor '{}' desconhecido", tensor.name))
                })?;
                let restored = Tensor::from_vec(tensor.data, tensor.shape, &classifier.device)?;
                var.set(&restored)?;
            }
        }
        info!(caminho = %path.display(), "modelo carregado");
        Ok(classifier)
    }
}
