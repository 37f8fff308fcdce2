use xml::writer::XmlEvent;

use crate::{
    header_gen::{agent, org_id, text, HeaderString, PartyString},
    start_document, SepaDocument, SepaError, SepaSchema, ToXml, Transfer,
};

pub struct DocumentString {
    schema: SepaSchema,
    header: HeaderString,
    payment_information: PaymentInformationString,
}

impl ToXml for DocumentString {
    fn to_xml(&self) -> Vec<XmlEvent> {
        let mut v = vec![
            start_document(),
            XmlEvent::start_element("Document")
                .default_ns(self.schema.namespace())
                .ns("xsi", "http://www.w3.org/2001/XMLSchema-instance")
                .into(),
            XmlEvent::start_element("CstmrCdtTrfInitn").into(),
        ];
        v.extend(self.header.to_xml());
        v.extend(self.payment_information.to_xml());
        v.push(XmlEvent::end_element().into());
        v.push(XmlEvent::end_element().into());
        v
    }
}

impl TryFrom<&super::CreditTransfer> for DocumentString {
    type Error = SepaError;

    fn try_from(value: &super::CreditTransfer) -> Result<Self, Self::Error> {
        value.check_mandatory_data()?;
        let debtor = value
            .debtor()
            .ok_or_else(|| SepaError::rule("The debtor is mandatory."))?;
        let header = value.header();
        Ok(Self {
            schema: value.schema(),
            header: HeaderString::new(
                header,
                value.number_of_transactions(),
                value.header_control_sum(),
                debtor.name(),
            ),
            payment_information: PaymentInformationString {
                payment_information_id: header.payment_info_id().to_string(),
                number_of_transactions: value.number_of_transactions().to_string(),
                control_sum: value.payment_control_sum().xml_string(),
                local_instrument: header.local_instrument_code.clone(),
                category_purpose: header.category_purpose_code.clone(),
                execution_date: header.requested_execution_date.to_string(),
                debtor: debtor.into(),
                debtor_id: header.initiating_party_id.clone(),
                debtor_currency: value.debtor_account_currency().to_string(),
                creditors: value.transactions().iter().map(|t| t.into()).collect(),
            },
        })
    }
}

struct PaymentInformationString {
    payment_information_id: String,
    number_of_transactions: String,
    control_sum: String,
    local_instrument: Option<String>,
    category_purpose: Option<String>,
    execution_date: String,
    debtor: PartyString,
    debtor_id: Option<String>,
    debtor_currency: String,
    creditors: Vec<CreditorString>,
}

impl ToXml for PaymentInformationString {
    fn to_xml(&self) -> Vec<XmlEvent> {
        let mut v = vec![
            XmlEvent::start_element("PmtInf").into(),
            XmlEvent::start_element("PmtInfId").into(),
            XmlEvent::characters(&self.payment_information_id),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("PmtMtd").into(),
            XmlEvent::characters("TRF"),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("NbOfTxs").into(),
            XmlEvent::characters(&self.number_of_transactions),
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
        ];
        if let Some(code) = &self.local_instrument {
            v.push(XmlEvent::start_element("LclInstrm").into());
            v.extend(text("Cd", code));
            v.push(XmlEvent::end_element().into());
        }
        if let Some(code) = &self.category_purpose {
            v.push(XmlEvent::start_element("CtgyPurp").into());
            v.extend(text("Cd", code));
            v.push(XmlEvent::end_element().into());
        }
        v.push(XmlEvent::end_element().into());
        v.extend(text("ReqdExctnDt", &self.execution_date));
        v.push(XmlEvent::start_element("Dbtr").into());
        v.extend(text("Nm", &self.debtor.name));
        if let Some(id) = &self.debtor_id {
            v.extend(org_id(id));
        }
        v.push(XmlEvent::end_element().into());
        v.extend([
            XmlEvent::start_element("DbtrAcct").into(),
            XmlEvent::start_element("Id").into(),
            XmlEvent::start_element("IBAN").into(),
            XmlEvent::characters(&self.debtor.iban),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("Ccy").into(),
            XmlEvent::characters(&self.debtor_currency),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
        ]);
        v.extend(agent("DbtrAgt", self.debtor.bic.as_deref()));
        v.extend(text("ChrgBr", "SLEV"));
        for creditor in &self.creditors {
            v.extend(creditor.to_xml());
        }
        v.push(XmlEvent::end_element().into());
        v
    }
}

struct CreditorString {
    id: Option<String>,
    end_to_end_id: String,
    amount: String,
    currency: String,
    creditor: PartyString,
    purpose: Option<String>,
    description: Option<String>,
}

impl ToXml for CreditorString {
    fn to_xml(&self) -> Vec<XmlEvent> {
        let mut v = vec![
            XmlEvent::start_element("CdtTrfTxInf").into(),
            XmlEvent::start_element("PmtId").into(),
        ];
        if let Some(id) = &self.id {
            v.extend(text("InstrId", id));
        }
        v.extend(text("EndToEndId", &self.end_to_end_id));
        v.extend([
            XmlEvent::end_element().into(),
            XmlEvent::start_element("Amt").into(),
            XmlEvent::start_element("InstdAmt")
                .attr("Ccy", &self.currency)
                .into(),
            XmlEvent::characters(&self.amount),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
        ]);
        v.extend(agent("CdtrAgt", self.creditor.bic.as_deref()));
        v.extend([
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
            XmlEvent::end_element().into(),
        ]);
        if let Some(purpose) = &self.purpose {
            v.push(XmlEvent::start_element("Purp").into());
            v.extend(text("Cd", purpose));
            v.push(XmlEvent::end_element().into());
        }
        if let Some(description) = &self.description {
            v.push(XmlEvent::start_element("RmtInf").into());
            v.extend(text("Ustrd", description));
            v.push(XmlEvent::end_element().into());
        }
        v.push(XmlEvent::end_element().into());
        v
    }
}

impl From<&super::CreditTransferTransaction> for CreditorString {
    fn from(value: &super::CreditTransferTransaction) -> Self {
        let info = value.info();
        Self {
            id: info.id().map(str::to_string),
            end_to_end_id: info.end_to_end_id().to_string(),
            amount: info.amount().xml_string(),
            currency: info.currency().to_string(),
            creditor: value.creditor().into(),
            purpose: value.purpose().map(str::to_string),
            description: info.remittance_information().map(str::to_string),
        }
    }
}
