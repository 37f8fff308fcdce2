use xml::writer::XmlEvent;

use crate::{
    header_gen::{agent, text, HeaderString, PartyString},
    start_document, SepaDocument, SepaError, SepaSchema, ToXml, Transfer,
};

use super::SequenceType;

pub struct DocumentString {
    schema: SepaSchema,
    header: HeaderString,
    payment_information: Vec<PaymentInformationString>,
}

impl ToXml for DocumentString {
    fn to_xml(&self) -> Vec<XmlEvent> {
        let mut v = vec![
            start_document(),
            XmlEvent::start_element("Document")
                .default_ns(self.schema.namespace())
                .ns("xsi", "http://www.w3.org/2001/XMLSchema-instance")
                .into(),
            XmlEvent::start_element("CstmrDrctDbtInitn").into(),
        ];
        v.extend(self.header.to_xml());
        v.extend(self.payment_information.iter().flat_map(|p| p.to_xml()));
        v.push(XmlEvent::end_element().into());
        v.push(XmlEvent::end_element().into());
        v
    }
}

impl TryFrom<&super::DebitTransfer> for DocumentString {
    type Error = SepaError;

    fn try_from(value: &super::DebitTransfer) -> Result<Self, Self::Error> {
        value.check_mandatory_data()?;
        let creditor = value
            .creditor()
            .ok_or_else(|| SepaError::rule("The creditor is mandatory."))?;
        let header = value.header();

        let groups: Vec<(SequenceType, Vec<&super::DebitTransferTransaction>)> =
            SequenceType::ALL
                .into_iter()
                .map(|s| (s, value.transactions_of(s).collect::<Vec<_>>()))
                .filter(|(_, transactions)| !transactions.is_empty())
                .collect();
        // ids have to stay unique once the batch is split up
        let split = groups.len() > 1;

        let payment_information = groups
            .into_iter()
            .map(|(sequence_type, transactions)| {
                let control_sum = transactions
                    .iter()
                    .map(|t| t.amount())
                    .sum::<sepa_tools_types::Amount>();
                PaymentInformationString {
                    payment_information_id: if split {
                        format!("{}-{}", header.payment_info_id(), sequence_type.code())
                    } else {
                        header.payment_info_id().to_string()
                    },
                    num_transactions: transactions.len().to_string(),
                    control_sum: control_sum.xml_string(),
                    local_instrument: header
                        .local_instrument_code
                        .clone()
                        .unwrap_or_else(|| "CORE".to_string()),
                    sequence_type: sequence_type.code(),
                    category_purpose: header.category_purpose_code.clone(),
                    collection_date: header.requested_execution_date.to_string(),
                    creditor: creditor.into(),
                    creditor_currency: value.creditor_account_currency().to_string(),
                    creditor_id: value.person_id().map(str::to_string),
                    debtors: transactions.into_iter().map(|t| t.into()).collect(),
                }
            })
            .collect();

        Ok(Self {
            schema: value.schema(),
            header: HeaderString::new(
                header,
                value.number_of_transactions(),
                value.header_control_sum(),
                creditor.name(),
            ),
            payment_information,
        })
    }
}

struct PaymentInformationString {
    payment_information_id: String,
    num_transactions: String,
    /// Sum of this block only
    control_sum: String,
    local_instrument: String,
    sequence_type: &'static str,
    category_purpose: Option<String>,
    collection_date: String,
    creditor: PartyString,
    creditor_currency: String,
    /// Creditor scheme id
    creditor_id: Option<String>,
    debtors: Vec<DebtorString>,
}

impl ToXml for PaymentInformationString {
    fn to_xml(&self) -> Vec<XmlEvent> {
        let mut xml = vec![
            XmlEvent::start_element("PmtInf").into(),
            XmlEvent::start_element("PmtInfId").into(),
            XmlEvent::characters(&self.payment_information_id),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("PmtMtd").into(),
            XmlEvent::characters("DD"),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("NbOfTxs").into(),
            XmlEvent::characters(&self.num_transactions),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("CtrlSum").into(),
            XmlEvent::characters(&self.control_sum),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("PmtTpInf").into(),
            XmlEvent::start_element("SvcLvl").into(),
            XmlEvent::start_element("Cd").into(),
            XmlEvent::characters("SEPA"),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("LclInstrm").into(),
            XmlEvent::start_element("Cd").into(),
            XmlEvent::characters(&self.local_instrument),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("SeqTp").into(),
            XmlEvent::characters(self.sequence_type),
            XmlEvent::end_element().into(),
        ];
        if let Some(code) = &self.category_purpose {
            xml.push(XmlEvent::start_element("CtgyPurp").into());
            xml.extend(text("Cd", code));
            xml.push(XmlEvent::end_element().into());
        }
        xml.extend([
            XmlEvent::end_element().into(),
            XmlEvent::start_element("ReqdColltnDt").into(),
            XmlEvent::characters(&self.collection_date),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("Cdtr").into(),
            XmlEvent::start_element("Nm").into(),
            XmlEvent::characters(&self.creditor.name),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("CdtrAcct").into(),
            XmlEvent::start_element("Id").into(),
            XmlEvent::start_element("IBAN").into(),
            XmlEvent::characters(&self.creditor.iban),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("Ccy").into(),
            XmlEvent::characters(&self.creditor_currency),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
        ]);
        xml.extend(agent("CdtrAgt", self.creditor.bic.as_deref()));
        xml.extend(text("ChrgBr", "SLEV"));
        if let Some(creditor_id) = &self.creditor_id {
            xml.extend([
                XmlEvent::start_element("CdtrSchmeId").into(),
                XmlEvent::start_element("Id").into(),
                XmlEvent::start_element("PrvtId").into(),
                XmlEvent::start_element("Othr").into(),
                XmlEvent::start_element("Id").into(),
                XmlEvent::characters(creditor_id),
                XmlEvent::end_element().into(),
                XmlEvent::start_element("SchmeNm").into(),
                XmlEvent::start_element("Prtry").into(),
                XmlEvent::characters("SEPA"),
                XmlEvent::end_element().into(),
                XmlEvent::end_element().into(),
                XmlEvent::end_element().into(),
                XmlEvent::end_element().into(),
                XmlEvent::end_element().into(),
                XmlEvent::end_element().into(),
            ]);
        }

        xml.extend(self.debtors.iter().flat_map(|d| d.to_xml()));
        xml.push(XmlEvent::end_element().into());
        xml
    }
}

struct DebtorString {
    instruction_id: Option<String>,
    end_to_end_id: String,
    amount: String,
    currency: String,
    debtor: PartyString,
    mandate_id: String,
    mandate_date: String,
    description: Option<String>,
}

impl ToXml for DebtorString {
    fn to_xml(&self) -> Vec<XmlEvent> {
        let mut v = vec![
            XmlEvent::start_element("DrctDbtTxInf").into(),
            XmlEvent::start_element("PmtId").into(),
        ];
        if let Some(id) = &self.instruction_id {
            v.extend(text("InstrId", id));
        }
        v.extend([
            XmlEvent::start_element("EndToEndId").into(),
            XmlEvent::characters(&self.end_to_end_id),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("InstdAmt")
                .attr("Ccy", &self.currency)
                .into(),
            XmlEvent::characters(&self.amount),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("DrctDbtTx").into(),
            XmlEvent::start_element("MndtRltdInf").into(),
            XmlEvent::start_element("MndtId").into(),
            XmlEvent::characters(&self.mandate_id),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("DtOfSgntr").into(),
            XmlEvent::characters(&self.mandate_date),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
        ]);
        v.extend(agent("DbtrAgt", self.debtor.bic.as_deref()));
        v.extend([
            XmlEvent::start_element("Dbtr").into(),
            XmlEvent::start_element("Nm").into(),
            XmlEvent::characters(&self.debtor.name),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("DbtrAcct").into(),
            XmlEvent::start_element("Id").into(),
            XmlEvent::start_element("IBAN").into(),
            XmlEvent::characters(&self.debtor.iban),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
        ]);
        if let Some(description) = &self.description {
            v.push(XmlEvent::start_element("RmtInf").into());
            v.extend(text("Ustrd", description));
            v.push(XmlEvent::end_element().into());
        }
        v.push(XmlEvent::end_element().into());
        v
    }
}

impl From<&super::DebitTransferTransaction> for DebtorString {
    fn from(value: &super::DebitTransferTransaction) -> Self {
        let info = value.info();
        Self {
            instruction_id: info.id().map(str::to_string),
            end_to_end_id: info.end_to_end_id().to_string(),
            amount: info.amount().xml_string(),
            currency: info.currency().to_string(),
            debtor: value.debtor().into(),
            mandate_id: value.mandate_identification().to_string(),
            mandate_date: value.date_of_signature().to_string(),
            description: info.remittance_information().map(str::to_string),
        }
    }
}
